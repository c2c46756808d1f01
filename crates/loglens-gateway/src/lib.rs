//! HTTP ingress for push-delivered log entries.

pub mod push_ingress_server;

pub use push_ingress_server::{
    build_push_ingress_router, run_push_ingress_server, PushIngressState, PUSH_ENDPOINT,
    PUSH_ENDPOINT_ANY_PATH,
};
