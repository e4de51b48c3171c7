/*!
 * # Permissions Module
 *
 * Permission strings are `resource:action` pairs carried in the token's
 * `permissions` claim.
 */

/// Role that bypasses every permission check.
pub const ADMIN_ROLE: &str = "admin";

/// Common permission string constants for compile-time safety
pub mod consts {
    // Feed inventory and consumption
    pub const FEED_READ: &str = "feed:read";
    pub const FEED_RECEIVE: &str = "feed:receive";
    pub const FEED_CONSUME: &str = "feed:consume";

    // Flocks
    pub const FLOCKS_READ: &str = "flocks:read";
    pub const FLOCKS_WRITE: &str = "flocks:write";

    /// Every permission the service knows about.
    pub const ALL: [&str; 5] = [FEED_READ, FEED_RECEIVE, FEED_CONSUME, FLOCKS_READ, FLOCKS_WRITE];
}

/// Splits `resource:action` into its parts.
pub fn parse_permission(permission: &str) -> Option<(&str, &str)> {
    let (resource, action) = permission.split_once(':')?;
    if resource.is_empty() || action.is_empty() {
        return None;
    }
    Some((resource, action))
}
