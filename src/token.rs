//! Contains the [`Loc`] and [`Token`] types, which carry the origin of a piece of text through
//! the pipeline so that reports can point at it.

use std::fmt::{Display, Error, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A location in a resource. The resource may be a local file or a remote url; both are kept as
/// a pathname because that's how they are shown in reports.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Loc {
    pathname: Arc<PathBuf>,
    /// line 0 means the loc applies to the resource as a whole.
    pub line: u32,
    pub column: u32,
}

impl Loc {
    pub fn for_file<P: Into<PathBuf>>(pathname: P) -> Self {
        Loc { pathname: Arc::new(pathname.into()), line: 0, column: 0 }
    }

    /// Return a `Loc` in the same resource but at the start of the given line.
    #[must_use]
    pub fn at_line(&self, line: u32) -> Self {
        Loc { pathname: Arc::clone(&self.pathname), line, column: 1 }
    }

    pub fn pathname(&self) -> &Path {
        &self.pathname
    }
}

impl Display for Loc {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        if self.line == 0 {
            write!(f, "{}", self.pathname.display())
        } else {
            write!(f, "{}:{}:{}", self.pathname.display(), self.line, self.column)
        }
    }
}

/// A string together with the location it came from.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Token {
    s: String,
    pub loc: Loc,
}

impl Token {
    pub fn new(s: &str, loc: Loc) -> Self {
        Token { s: s.to_owned(), loc }
    }

    pub fn as_str(&self) -> &str {
        &self.s
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        write!(f, "{}", self.s)
    }
}

impl From<Loc> for Token {
    fn from(loc: Loc) -> Self {
        Token { s: String::new(), loc }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loc_display() {
        let loc = Loc::for_file("logs/Network_1.log");
        assert_eq!(loc.to_string(), "logs/Network_1.log");
        assert_eq!(loc.at_line(12).to_string(), "logs/Network_1.log:12:1");
    }

    #[test]
    fn test_url_pathname() {
        let loc = Loc::for_file("https://example.com/raidboss/data/p1s.txt").at_line(3);
        assert_eq!(loc.to_string(), "https://example.com/raidboss/data/p1s.txt:3:1");
    }
}
