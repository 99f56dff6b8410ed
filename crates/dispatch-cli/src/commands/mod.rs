pub mod case;
pub mod completions;
pub mod inspect;
pub mod run;
pub mod validate;
