// Adapters layer: concrete middleware implementations behind `MiddlewareProvider`.

pub mod openstack;

pub use openstack::{OpenStackOptions, OpenStackProvider};
