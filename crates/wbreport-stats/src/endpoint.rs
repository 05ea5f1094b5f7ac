/// Statistics endpoints, addressed as suffixes of the API base path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Sales,
    Stocks,
    Orders,
    Advert,
    Funnel,
    Ping,
}

impl Endpoint {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Sales => "sales",
            Endpoint::Stocks => "stocks",
            Endpoint::Orders => "orders",
            Endpoint::Advert => "advert",
            Endpoint::Funnel => "funnel",
            Endpoint::Ping => "ping",
        }
    }

    /// Endpoints the backend may not support for every account. Their
    /// failures degrade to an empty result instead of aborting the run.
    #[must_use]
    pub fn is_optional(self) -> bool {
        matches!(self, Endpoint::Advert | Endpoint::Funnel)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}
