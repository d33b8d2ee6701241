use clap::ValueEnum;

/// The three categories of patent-document sources, each with its own XML
/// schema, field-rename rules, and Solr core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocType {
    /// Issued patent grants
    #[value(name = "g", alias = "grants")]
    Grants,
    /// Published patent applications
    #[value(name = "p", alias = "pubs")]
    Pubs,
    /// Patent Trial and Appeal Board proceeding records
    #[value(name = "pt", alias = "ptab")]
    Ptab,
}

impl DocType {
    /// Name of the input subdirectory under the files root.
    pub fn dir_name(self) -> &'static str {
        match self {
            DocType::Grants => "GRANTS",
            DocType::Pubs => "PUBS",
            DocType::Ptab => "PTAB",
        }
    }

    /// Top-level record element of a split document unit.
    pub fn record_tag(self) -> &'static str {
        match self {
            DocType::Grants => "us-patent-grant",
            DocType::Pubs => "us-patent-application-publication",
            DocType::Ptab => "DATA_RECORD",
        }
    }

    /// Bibliographic wrapper element inside a grant/publication record.
    pub fn bib_tag(self) -> &'static str {
        match self {
            DocType::Grants => "us-bibliographic-data-grant",
            DocType::Pubs => "us-bibliographic-data-application",
            DocType::Ptab => "",
        }
    }

    /// Whether sources of this type are concatenated master files that must
    /// be split into per-document units first. PTAB files arrive one batch
    /// per file and bypass the split stage.
    pub fn needs_split(self) -> bool {
        !matches!(self, DocType::Ptab)
    }

    /// Expected format of a `--dates` filter value for this type.
    pub fn date_filter_format(self) -> &'static str {
        match self {
            DocType::Grants | DocType::Pubs => "YYYY",
            DocType::Ptab => "YYYYMMDD",
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_names() {
        assert_eq!(DocType::Grants.dir_name(), "GRANTS");
        assert_eq!(DocType::Pubs.dir_name(), "PUBS");
        assert_eq!(DocType::Ptab.dir_name(), "PTAB");
    }

    #[test]
    fn test_only_ptab_skips_split() {
        assert!(DocType::Grants.needs_split());
        assert!(DocType::Pubs.needs_split());
        assert!(!DocType::Ptab.needs_split());
    }
}
