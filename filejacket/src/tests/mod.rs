mod compare_test;
mod content_test;
mod pipeline_test;
mod render_test;
