/// Icons used in restore progress and summary output.
///
/// Requires a Nerd Font in the terminal; JSON output carries them verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NerdFont {
    Check,
    CrossCircle,
    Warning,
    Info,
    Minus,
    Package,
    Download,
    Desktop,
    Wrench,
    List,
    Save,
}

impl NerdFont {
    pub fn unicode(self) -> char {
        match self {
            Self::Check => '\u{f00c}',       // fa-check
            Self::CrossCircle => '\u{f057}', // fa-times-circle
            Self::Warning => '\u{f071}',     // fa-exclamation-triangle
            Self::Info => '\u{f05a}',        // fa-info-circle
            Self::Minus => '\u{f068}',       // fa-minus
            Self::Package => '\u{f187}',     // fa-archive
            Self::Download => '\u{f019}',    // fa-download
            Self::Desktop => '\u{f108}',     // fa-desktop
            Self::Wrench => '\u{f0ad}',      // fa-wrench
            Self::List => '\u{f03a}',        // fa-list
            Self::Save => '\u{f0c7}',        // fa-save
        }
    }
}

impl From<NerdFont> for char {
    fn from(icon: NerdFont) -> Self {
        icon.unicode()
    }
}
