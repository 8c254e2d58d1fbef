pub(crate) mod format;
mod history;
mod live;

pub(crate) use history::run_history;
pub(crate) use live::run_live;
