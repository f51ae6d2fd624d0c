pub mod json_state_store;
