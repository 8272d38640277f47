pub(crate) mod reaper;
