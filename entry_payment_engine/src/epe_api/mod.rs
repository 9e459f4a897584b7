pub mod payment_flow_api;
