//! Problems assembled from weak forms and their nonlinear solution.
mod bc;
mod fe_nonlinear;
mod fe_problem;
mod fields;
mod nonlinear;

pub use bc::*;
pub use fe_nonlinear::*;
pub use fe_problem::*;
pub use fields::*;
pub use nonlinear::*;
