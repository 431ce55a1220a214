pub mod errors;
pub mod db;
pub mod month_date;
pub mod validator;
pub mod filters;
pub mod subscription;

pub use month_date::MonthDate;

#[cfg(test)]
mod tests;
