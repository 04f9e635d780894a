//! Drive the C surface the way a foreign host would: build a request,
//! execute it with the host's own HTTP stack (`ureq` here), hand the
//! response back to a parse function, then free everything.

use std::ffi::{CStr, CString};
use std::net::SocketAddr;
use std::os::raw::c_char;

use wallet_ffi::types::*;
use wallet_ffi::*;

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn c_str<'a>(p: *const c_char) -> &'a str {
    unsafe { CStr::from_ptr(p) }.to_str().unwrap()
}

/// Execute `req` and free it. Returns (status, body).
fn execute(agent: &ureq::Agent, req: *mut FfiHttpRequest) -> (u16, CString) {
    assert!(!req.is_null());
    let r = unsafe { &*req };
    let path = c_str(r.path);
    let headers: Vec<(&str, &str)> = if r.headers_len == 0 {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(r.headers, r.headers_len as usize) }
            .iter()
            .map(|h| (c_str(h.key), c_str(h.value)))
            .collect()
    };
    let body = if r.body.is_null() { "" } else { c_str(r.body) };

    macro_rules! with_headers {
        ($builder:expr) => {{
            let mut b = $builder;
            for (k, v) in &headers {
                b = b.header(*k, *v);
            }
            b
        }};
    }
    let mut response = match r.method {
        FfiHttpMethod::Get => with_headers!(agent.get(path)).call(),
        FfiHttpMethod::Delete => with_headers!(agent.delete(path)).call(),
        FfiHttpMethod::Post => with_headers!(agent.post(path)).send(body),
        FfiHttpMethod::Put => with_headers!(agent.put(path)).send(body),
    }
    .unwrap();

    let status = response.status().as_u16();
    let text = response.body_mut().read_to_string().unwrap();
    wallet_free_request(req);
    (status, CString::new(text).unwrap())
}

#[test]
fn template_and_pass_through_c_surface() {
    let addr = start_server();
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let url = CString::new(format!("http://{addr}")).unwrap();
    let client = wallet_client_new(url.as_ptr(), std::ptr::null());

    // create a template
    let template = CString::new(
        r#"{"headers":{"logoText":"Gym"},"fields":{"visits":{"value":0,"label":"Visits"}},"name":"Gym","description":"Members","type":"generic"}"#,
    )
    .unwrap();
    let (status, body) = execute(&agent, wallet_build_create_template(client, std::ptr::null(), template.as_ptr()));
    let result = wallet_parse_create_template(client, &FfiHttpResponse { status, body: body.as_ptr() });
    let template_id = {
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        let id = unsafe { &*(r.data as *const FfiTemplateId) };
        assert!(id.has_id);
        id.id
    };
    wallet_free_result(result);

    // create a pass from it
    let fields = CString::new(r#"{"visits":1}"#).unwrap();
    let (status, body) = execute(&agent, wallet_build_create_pass(client, template_id, fields.as_ptr()));
    let result = wallet_parse_create_pass(client, template_id, &FfiHttpResponse { status, body: body.as_ptr() });
    let pass_id = {
        let pass = unsafe { &*((*result).data as *const FfiPass) };
        assert_eq!(pass.template_id, template_id);
        assert_eq!(c_str(pass.fields_json), r#"{"visits":1}"#);
        pass.pass_id
    };
    wallet_free_result(result);

    // update, then read back
    let fields = CString::new(r#"{"visits":2}"#).unwrap();
    let (status, body) = execute(&agent, wallet_build_update_pass(client, pass_id, fields.as_ptr()));
    let result = wallet_parse_update_pass(client, &FfiHttpResponse { status, body: body.as_ptr() });
    let new_url = c_str(unsafe { &*result }.data as *const c_char).to_string();
    wallet_free_result(result);

    let (status, body) = execute(&agent, wallet_build_get_pass(client, pass_id));
    let result = wallet_parse_get_pass(client, &FfiHttpResponse { status, body: body.as_ptr() });
    let pass = unsafe { &*((*result).data as *const FfiPass) };
    assert_eq!(c_str(pass.fields_json), r#"{"visits":2}"#);
    assert_eq!(c_str(pass.url), new_url);
    wallet_free_result(result);

    // delete the template; a second delete is an HTTP error
    for expected in [FfiErrorCode::Ok, FfiErrorCode::Http] {
        let (status, body) = execute(&agent, wallet_build_delete_template(client, template_id, std::ptr::null()));
        let result = wallet_parse_delete_template(client, &FfiHttpResponse { status, body: body.as_ptr() });
        assert_eq!(unsafe { &*result }.error_code, expected);
        wallet_free_result(result);
    }

    wallet_client_free(client);
}
