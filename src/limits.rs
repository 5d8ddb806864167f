/// Max concrete dates a single recurring request may expand into.
pub const MAX_DATES_PER_REQUEST: usize = 1_000;

/// Max opaque attributes carried on a request.
pub const MAX_ATTRIBUTES: usize = 32;

/// Max byte length of an attribute key or value.
pub const MAX_ATTRIBUTE_LEN: usize = 1_024;
