pub mod iosxr;
pub mod ios;
pub mod mock;
pub mod nxos_ssh;

pub use ios::IosDriver;
pub use iosxr::IosxrDriver;
pub use mock::MockClassifierDriver;
pub use nxos_ssh::NxosSshDriver;
