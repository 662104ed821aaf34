pub(crate) mod data {
    pub(crate) mod datasources {
        pub(crate) mod verify_receipt_datasource;
    }
    pub(crate) mod models {
        pub(crate) mod verify_receipt {
            pub(crate) mod common;
            pub(crate) mod request_body_model;
            pub(crate) mod response_body_model;
        }
    }
    pub(crate) mod repositories {
        pub(crate) mod receipt_repository_impl;
    }
}

pub mod domain {
    pub mod entities {
        pub mod environment;
        pub mod receipt_payload;
        pub mod receipt_response;
        pub mod validation_result;
        pub mod verification_request;
    }
    pub mod repositories {
        pub mod receipt_fetcher;
        pub mod receipt_repository;
    }
    pub(crate) mod validation {
        pub(crate) mod response_validator;
    }
}

pub mod config;
pub mod constants;
pub mod errors;
pub mod util;
