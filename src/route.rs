use std::fmt;

/// The three screens of the console.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Route {
    /// `/`: paginated member list.
    #[default]
    List,
    /// `/add`: create form.
    Add,
    /// `/edit/{id}`: edit form for one member.
    Edit(String),
}

impl Route {
    /// Parses a path. A leading slash and a trailing slash are optional.
    ///
    /// ```
    /// use roster::route::Route;
    ///
    /// assert_eq!(Route::parse("/"), Some(Route::List));
    /// assert_eq!(Route::parse("edit/42"), Some(Route::Edit("42".into())));
    /// assert_eq!(Route::parse("/nope"), None);
    /// ```
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim_start_matches('/').trim_end_matches('/');
        match path.split('/').collect::<Vec<_>>().as_slice() {
            [""] => Some(Self::List),
            ["add"] => Some(Self::Add),
            ["edit", id] if !id.is_empty() => Some(Self::Edit((*id).to_string())),
            _ => None,
        }
    }

    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::List => "/".to_string(),
            Self::Add => "/add".to_string(),
            Self::Edit(id) => format!("/edit/{id}"),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
