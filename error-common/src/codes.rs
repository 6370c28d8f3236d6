// Standardized error codes for the AAC billing engine

pub mod billing {
    pub const NO_PROFILE: &str = "BILLING_1001";
    pub const NO_BILLABLE_SESSIONS: &str = "BILLING_1002";
    pub const NO_AUTHORIZATION: &str = "BILLING_1003";
    pub const INSUFFICIENT_UNITS: &str = "BILLING_1004";
    pub const CLAIM_NOT_FOUND: &str = "BILLING_1005";
    pub const CLAIM_IMMUTABLE: &str = "BILLING_1006";
    pub const CLEARINGHOUSE_FAILURE: &str = "BILLING_1007";
    pub const EXPORT_FAILED: &str = "BILLING_1008";
}

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_2001";
    pub const INVALID_PROFILE: &str = "VALIDATION_2002";
}

pub mod storage {
    pub const BACKEND_FAILURE: &str = "STORAGE_3001";
}
