pub mod ordering;
pub mod session;
pub mod state;

pub mod prelude {
    pub use super::{
        ordering::{is_orderable, order_transactions},
        session::{Session, SessionTransition},
        state::ConsoleState,
    };
}
