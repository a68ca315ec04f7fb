mod checkpoint_test;
mod completion_test;
mod context_test;
mod dispatcher_test;
mod latch_test;
