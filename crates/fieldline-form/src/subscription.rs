//! Subscribable attribute masks

use bitflags::bitflags;

bitflags! {
    /// Form-level attributes a subscriber can ask for
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FormSubscription: u32 {
        const ACTIVE                          = 1 << 0;
        const DIRTY                           = 1 << 1;
        const DIRTY_FIELDS                    = 1 << 2;
        const DIRTY_FIELDS_SINCE_LAST_SUBMIT  = 1 << 3;
        const DIRTY_SINCE_LAST_SUBMIT         = 1 << 4;
        const ERROR                           = 1 << 5;
        const ERRORS                          = 1 << 6;
        const HAS_SUBMIT_ERRORS               = 1 << 7;
        const HAS_VALIDATION_ERRORS           = 1 << 8;
        const INITIAL_VALUES                  = 1 << 9;
        const INVALID                         = 1 << 10;
        const MODIFIED                        = 1 << 11;
        const MODIFIED_SINCE_LAST_SUBMIT      = 1 << 12;
        const PRISTINE                        = 1 << 13;
        const SUBMIT_ERROR                    = 1 << 14;
        const SUBMIT_ERRORS                   = 1 << 15;
        const SUBMIT_FAILED                   = 1 << 16;
        const SUBMIT_SUCCEEDED                = 1 << 17;
        const SUBMITTING                      = 1 << 18;
        const TOUCHED                         = 1 << 19;
        const VALID                           = 1 << 20;
        const VALIDATING                      = 1 << 21;
        const VALUES                          = 1 << 22;
        const VISITED                         = 1 << 23;
    }
}

bitflags! {
    /// Field-level attributes a subscriber can ask for
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldSubscription: u32 {
        const ACTIVE                      = 1 << 0;
        const DATA                        = 1 << 1;
        const DIRTY                       = 1 << 2;
        const DIRTY_SINCE_LAST_SUBMIT     = 1 << 3;
        const ERROR                       = 1 << 4;
        const INITIAL                     = 1 << 5;
        const INVALID                     = 1 << 6;
        const LENGTH                      = 1 << 7;
        const MODIFIED                    = 1 << 8;
        const MODIFIED_SINCE_LAST_SUBMIT  = 1 << 9;
        const PRISTINE                    = 1 << 10;
        const SUBMIT_ERROR                = 1 << 11;
        const SUBMIT_FAILED               = 1 << 12;
        const SUBMIT_SUCCEEDED            = 1 << 13;
        const SUBMITTING                  = 1 << 14;
        const TOUCHED                     = 1 << 15;
        const VALID                       = 1 << 16;
        const VALIDATING                  = 1 << 17;
        const VALUE                       = 1 << 18;
        const VISITED                     = 1 << 19;
    }
}

impl Default for FormSubscription {
    fn default() -> Self {
        FormSubscription::empty()
    }
}

impl Default for FieldSubscription {
    fn default() -> Self {
        FieldSubscription::empty()
    }
}
