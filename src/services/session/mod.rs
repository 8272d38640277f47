pub(crate) mod answers;
pub(crate) mod controller;
pub(crate) mod navigation;
pub(crate) mod registry;
pub(crate) mod store;
pub(crate) mod timer;
