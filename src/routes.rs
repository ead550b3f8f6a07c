pub const HOME_PATH: &str = "/home";
pub const ANALYTICS_PATH: &str = "/analytics";
pub const ABOUT_PATH: &str = "/about";

/// Links shown in the navbar, in display order.
pub const NAV_LINKS: &[(&str, &str)] = &[(ANALYTICS_PATH, "Analytics"), (ABOUT_PATH, "About")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Analytics,
    About,
    NotFound(String),
}

impl Route {
    /// Resolve a path. The root redirects to the analytics page.
    pub fn parse(path: &str) -> Route {
        let path = path.trim();
        let normalized = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        match normalized {
            "/" | ANALYTICS_PATH => Route::Analytics,
            HOME_PATH => Route::Home,
            ABOUT_PATH => Route::About,
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Home => HOME_PATH,
            Route::Analytics => ANALYTICS_PATH,
            Route::About => ABOUT_PATH,
            Route::NotFound(path) => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_redirects_to_analytics() {
        assert_eq!(Route::parse("/"), Route::Analytics);
        assert_eq!(Route::parse(""), Route::Analytics);
    }

    #[test]
    fn known_paths_resolve() {
        assert_eq!(Route::parse("/home"), Route::Home);
        assert_eq!(Route::parse("/about/"), Route::About);
        assert_eq!(Route::parse(" /analytics "), Route::Analytics);
    }

    #[test]
    fn unknown_path_is_not_found() {
        assert_eq!(Route::parse("/settings"), Route::NotFound("/settings".to_string()));
        assert_eq!(Route::parse("/settings").path(), "/settings");
    }
}
