pub mod lbfgs;
pub mod steepest_descent;
