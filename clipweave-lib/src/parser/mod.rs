pub mod weave_html;
