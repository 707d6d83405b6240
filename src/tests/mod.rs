mod support;

mod proxy_tests;
