pub mod abilities;
pub mod device_info;
pub mod device_record;
pub mod energy;
pub mod system;
