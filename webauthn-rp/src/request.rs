/// What the relying party's HTTP layer knows about the request carrying a ceremony response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Host the request was addressed to, used as the RP ID when the ceremony options carry
    /// none.
    pub host: Option<String>,

    /// Value of the `Sec-Token-Binding` header, the base64url token binding ID of the TLS
    /// connection.
    pub sec_token_binding: Option<String>,
}

impl RequestContext {
    /// A request addressed to `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            sec_token_binding: None,
        }
    }

    /// Set the `Sec-Token-Binding` header value.
    pub fn with_sec_token_binding(mut self, token_binding_id: impl Into<String>) -> Self {
        self.sec_token_binding = Some(token_binding_id.into());
        self
    }
}
