#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    Zip,
    TarGz,
    TarBz2,
    TarXz,
}

impl ArchiveType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::TarXz => "tar.xz",
        }
    }

    pub fn is_tar(self) -> bool {
        !matches!(self, Self::Zip)
    }

    /// Accepts the canonical name or its short alias (`tgz`, `tbz2`, `txz`).
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim().to_ascii_lowercase();
        SUFFIXES
            .iter()
            .find(|(name, _)| name.strip_prefix('.') == Some(input.as_str()))
            .map(|(_, kind)| *kind)
    }

    /// Guesses the archive kind from a file name or URL, ignoring any query
    /// string or fragment.
    pub fn infer_from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        let path = lower.split(['?', '#']).next().unwrap_or_default();
        SUFFIXES
            .iter()
            .find(|(suffix, _)| path.ends_with(suffix))
            .map(|(_, kind)| *kind)
    }
}

const SUFFIXES: [(&str, ArchiveType); 7] = [
    (".zip", ArchiveType::Zip),
    (".tar.gz", ArchiveType::TarGz),
    (".tgz", ArchiveType::TarGz),
    (".tar.bz2", ArchiveType::TarBz2),
    (".tbz2", ArchiveType::TarBz2),
    (".tar.xz", ArchiveType::TarXz),
    (".txz", ArchiveType::TarXz),
];
