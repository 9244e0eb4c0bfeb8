//! Fuzz target: `route_http`
//!
//! Arbitrary request targets must route to one of the three fixed
//! responses, and only the exact paths may reach `/open` or `/`.
//!
//! cargo fuzz run fuzz_http_router

#![no_main]

use dooropener::app::router::{HttpRoute, route_http};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(target) = core::str::from_utf8(data) else {
        return;
    };
    let route = route_http(target);
    let path = target.split(['?', '#']).next().unwrap_or_default();
    match route {
        HttpRoute::Open => assert_eq!(path, "/open"),
        HttpRoute::Index => assert_eq!(path, "/"),
        HttpRoute::NotFound => {
            assert!(path != "/open" && path != "/");
            assert_eq!(route.response().status, 404);
        }
    }
});
