/// Storefront serving the canonical listing page.
pub const DEFAULT_STOREFRONT_DOMAIN: &str = "play.google.com";

/// Canonical "view this app" URL for `package_id` on `domain`.
pub fn listing_url(domain: &str, package_id: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    format!("https://{domain}/store/apps/details?id={package_id}")
}
