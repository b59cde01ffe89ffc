mod common;

mod test_admission_concurrency;
