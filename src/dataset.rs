//! Remote dataset descriptors.

/// Base URL of the Anatel open-data panel for product certification.
pub const SCH_BASE_URL: &str =
    "https://www.anatel.gov.br/dadosabertos/paineis_de_dados/certificacao_de_produtos";

/// File name of the SCH certified-products archive.
pub const SCH_FILENAME: &str = "produtos_certificados.zip";

/// Fixed remote location of a dataset and the name it is cached under.
///
/// # Examples
///
/// ```
/// use sch_datasets::RemoteDataset;
///
/// let dataset = RemoteDataset::new("https://example.test/data/", "items.csv");
/// assert_eq!(dataset.url(), "https://example.test/data/items.csv");
/// assert_eq!(dataset.filename(), "items.csv");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDataset {
    base_url: String,
    filename: String,
}

impl RemoteDataset {
    /// Describes the dataset published at `base_url/filename`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            filename: filename.into(),
        }
    }

    /// The Anatel SCH certified-products dataset.
    #[must_use]
    pub fn sch() -> Self {
        Self::new(SCH_BASE_URL, SCH_FILENAME)
    }

    /// Replaces the base URL while keeping the file name.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Name of the file inside the cache directory.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Full download URL.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.filename)
    }
}

impl Default for RemoteDataset {
    fn default() -> Self {
        Self::sch()
    }
}
