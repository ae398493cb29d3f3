mod classify;
mod layout;
mod normalize;
mod page_index;
mod pipeline;
mod run;
mod state;

pub use run::run;
