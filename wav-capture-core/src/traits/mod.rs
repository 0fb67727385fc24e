pub mod capture_device;
pub mod session_delegate;
