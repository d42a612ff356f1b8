use gd_config::PluginConfig;
use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use gd_dpip::HostEvent;
use gd_navigator::NavigationOutcome;
use gd_navigator::NavigationReport;
use gd_navigator::Navigator;
use gd_net::GeminiUrl;
use gd_net::ProtocolClient;
use std::collections::HashMap;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

/// In-memory server: hosts must be pinned before they answer.
#[derive(Default)]
struct MockClient {
    pinned: HashSet<String>,
    invalid_hosts: HashSet<String>,
    responses: HashMap<String, Vec<u8>>,
    pin_failure: Option<DpiError>,
    requests: Vec<String>,
}

impl MockClient {
    fn serve(mut self, url: &str, response: &[u8]) -> Self {
        self.responses.insert(url.to_owned(), response.to_vec());
        self
    }

    fn pinned(mut self, host_port: &str) -> Self {
        self.pinned.insert(host_port.to_owned());
        self
    }
}

impl ProtocolClient for MockClient {
    type Body = Cursor<Vec<u8>>;

    fn request(&mut self, url: &str) -> DpiResult<Self::Body> {
        self.requests.push(url.to_owned());
        let host_port = GeminiUrl::parse(url, "gemini", 1965)?.host_port();

        if !self.pinned.contains(&host_port) {
            if self.invalid_hosts.contains(&host_port) {
                return Err(DpiError::new(ErrorKind::InvalidCert, "certificate expired"));
            }
            return Err(DpiError::new(
                ErrorKind::UntrustedCert,
                format!("the certificate for {host_port} is not pinned"),
            ));
        }

        match self.responses.get(url) {
            Some(response) => Ok(Cursor::new(response.clone())),
            None => Err(DpiError::new(ErrorKind::Connection, "connection refused")),
        }
    }

    fn pin(&mut self, host_port: &str) -> DpiResult<()> {
        if let Some(error) = self.pin_failure.clone() {
            return Err(error);
        }
        self.pinned.insert(host_port.to_owned());
        Ok(())
    }
}

fn navigator(client: MockClient) -> Navigator<MockClient> {
    Navigator::new(PluginConfig::for_home(Path::new("/home/user")), client)
}

fn open(navigator: &mut Navigator<MockClient>, url: &str) -> (NavigationReport, String) {
    let mut out = Vec::new();
    let report = navigator.handle_event(&HostEvent::open_url(url), &mut out);
    (report, String::from_utf8_lossy(&out).into_owned())
}

fn failure_kind(report: &NavigationReport) -> Option<ErrorKind> {
    match &report.outcome {
        NavigationOutcome::Failed(error) => Some(error.kind),
        _ => None,
    }
}

#[test]
fn untrusted_host_gets_pin_page_before_any_content() {
    let client = MockClient::default().serve("gemini://example.org/", b"20 text/gemini\r\n# Secret\n");
    let mut navigator = navigator(client);

    let (report, page) = open(&mut navigator, "gemini://example.org");

    assert_eq!(report.outcome, NavigationOutcome::Handled);
    assert!(page.contains("<h2>Suspicious or unknown certificate</h2>"));
    assert!(page.contains("<a href='gemini:pin:gemini://example.org/'>Pin example.org and continue</a>"));
    assert!(!page.contains("Secret"));
}

#[test]
fn invalid_certificate_also_routes_to_pin_page() {
    let mut client = MockClient::default();
    client.invalid_hosts.insert("example.org:1965".to_owned());
    let mut navigator = navigator(client);

    let (report, page) = open(&mut navigator, "gemini://example.org/");

    assert!(report.is_handled());
    assert!(page.contains("certificate expired"));
}

#[test]
fn pin_commit_redirects_and_replay_reaches_content() {
    let client = MockClient::default().serve("gemini://example.org/", b"20 text/gemini\r\n# Welcome\n");
    let mut navigator = navigator(client);

    let (first, _) = open(&mut navigator, "gemini://example.org/");
    assert!(first.is_handled());

    let (pinned, redirect) = open(&mut navigator, "gemini:pin:gemini://example.org/");
    assert!(pinned.is_handled());
    assert!(redirect.starts_with("<cmd='start_send_page' url='gemini:pin:gemini://example.org/' '>"));
    assert!(redirect.contains("<meta http-equiv='Refresh' content='0; url=gemini://example.org/'>"));
    assert!(navigator.client().pinned.contains("example.org:1965"));

    let (replayed, page) = open(&mut navigator, "gemini://example.org/");
    assert!(replayed.is_handled());
    assert!(page.contains("<h1>Welcome</h1>"));
}

#[test]
fn failed_pin_renders_error_without_redirect() {
    let mut client = MockClient::default();
    client.pin_failure = Some(DpiError::new(ErrorKind::Connection, "host unreachable"));
    let mut navigator = navigator(client);

    let (report, page) = open(&mut navigator, "gemini:pin:gemini://example.org/");

    assert_eq!(failure_kind(&report), Some(ErrorKind::Connection));
    assert!(page.contains("<title>Error</title>"));
    assert!(page.contains("host unreachable"));
    assert!(!page.contains("Refresh"));
}

#[test]
fn every_navigation_asks_the_client_again() {
    let client = MockClient::default()
        .pinned("example.org:1965")
        .serve("gemini://example.org/", b"20 text/gemini\r\nhi\n");
    let mut navigator = navigator(client);

    let _ = open(&mut navigator, "gemini://example.org/");
    navigator.client_mut().pinned.clear();
    let (report, page) = open(&mut navigator, "gemini://example.org/");

    assert!(report.is_handled());
    assert!(page.contains("Suspicious or unknown certificate"));
    assert_eq!(navigator.client().requests.len(), 2);
}

#[test]
fn markup_from_the_server_is_escaped() {
    let client = MockClient::default()
        .pinned("example.org:1965")
        .serve("gemini://example.org/ask", b"10 <script>alert(1)</script>\r\n");
    let mut navigator = navigator(client);

    let (_, page) = open(&mut navigator, "gemini://example.org/ask");
    assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!page.contains("<script>"));

    let (report, page) = open(&mut navigator, "gemini://unknown.org/<x>&");
    assert!(report.is_handled());
    assert!(page.contains("<title>Pin gemini://unknown.org/%3Cx%3E&amp;</title>"));
}

#[test]
fn connection_failure_renders_escaped_error_page() {
    let client = MockClient::default().pinned("example.org:1965");
    let mut navigator = navigator(client);

    let (report, page) = open(&mut navigator, "gemini://example.org/a&b");

    assert_eq!(failure_kind(&report), Some(ErrorKind::Connection));
    assert!(page.contains("<h2>Error on gemini://example.org/a&amp;b</h2>"));
}

#[test]
fn unparseable_url_fails_with_error_page() {
    let mut navigator = navigator(MockClient::default());

    let (report, page) = open(&mut navigator, "gemini://exa mple.org/");

    assert_eq!(failure_kind(&report), Some(ErrorKind::Parse));
    assert!(page.contains("<title>Error</title>"));
    assert!(navigator.client().requests.is_empty());
}

#[test]
fn malformed_header_fails_with_error_page() {
    let client = MockClient::default()
        .pinned("example.org:1965")
        .serve("gemini://example.org/", b"2 text/gemini\r\n");
    let mut navigator = navigator(client);

    let (report, page) = open(&mut navigator, "gemini://example.org/");

    assert_eq!(failure_kind(&report), Some(ErrorKind::Header));
    assert!(page.contains("<title>Error</title>"));
}

#[test]
fn unsupported_charset_still_renders_body() {
    let client = MockClient::default()
        .pinned("example.org:1965")
        .serve("gemini://example.org/", b"20 text/gemini; charset=shift_jis\r\nplain ascii line\n");
    let mut navigator = navigator(client);

    let (report, page) = open(&mut navigator, "gemini://example.org/");

    assert!(report.is_handled());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, ErrorKind::UnsupportedEncoding);
    assert!(page.contains("<p>plain ascii line</p>"));
}

#[test]
fn sensitive_input_round_trip() {
    let client = MockClient::default()
        .pinned("example.org:1965")
        .serve("gemini://example.org/login?old", b"11 Password\r\n");
    let mut navigator = navigator(client);

    let (report, page) = open(&mut navigator, "gemini://example.org/login?old");
    assert!(report.is_handled());
    assert!(page.contains("<input type='password' id='q' name='q'>"));
    assert!(page.contains("<form action='gemini:input:gemini://example.org/login' method='get'>"));

    let (report, redirect) = open(&mut navigator, "gemini:input:gemini://example.org/login?q=a+b%2Bc");
    assert!(report.is_handled());
    assert!(redirect.contains("content='0; url=gemini://example.org/login?a%20b%2Bc'"));
    assert_eq!(navigator.client().requests.len(), 1);
}

#[test]
fn input_submission_without_value_fails_with_error_page() {
    let mut navigator = navigator(MockClient::default());

    let (report, page) = open(&mut navigator, "gemini:input:gemini://example.org/login");

    assert_eq!(failure_kind(&report), Some(ErrorKind::MalformedQuery));
    assert!(page.contains("malformed query"));
}

#[test]
fn input_submission_with_broken_escape_fails_with_error_page() {
    let mut navigator = navigator(MockClient::default());

    let (report, page) = open(&mut navigator, "gemini:input:gemini://example.org/login?q=100%");

    assert_eq!(failure_kind(&report), Some(ErrorKind::Decode));
    assert!(page.contains("<title>Error</title>"));
    assert!(!page.contains("Refresh"));
}

#[test]
fn redirect_response_is_left_to_the_host() {
    let client = MockClient::default()
        .pinned("example.org:1965")
        .serve("gemini://example.org/old", b"31 gemini://example.org/new\r\n");
    let mut navigator = navigator(client);

    let (report, page) = open(&mut navigator, "gemini://example.org/old");

    assert!(report.is_handled());
    assert!(page.contains("content='0; url=gemini://example.org/new'"));
    assert_eq!(navigator.client().requests, vec!["gemini://example.org/old".to_owned()]);
}

#[test]
fn failure_status_is_rendered_literally() {
    let client = MockClient::default()
        .pinned("example.org:1965")
        .serve("gemini://example.org/missing", b"51 Not found\r\n");
    let mut navigator = navigator(client);

    let (report, page) = open(&mut navigator, "gemini://example.org/missing");

    assert!(report.is_handled());
    assert!(page.ends_with("Content-Type: text/plain\r\n\r\n51 Not found\n"));
}

#[test]
fn non_navigation_commands_are_not_handled() {
    let mut navigator = navigator(MockClient::default());
    let tag = gd_dpip::DpipTag::new().with("cmd", "auth").with("msg", "key");
    let event = match HostEvent::from_tag(tag) {
        Ok(value) => value,
        Err(error) => panic!("{error}"),
    };

    let mut out = Vec::new();
    let report = navigator.handle_event(&event, &mut out);

    assert_eq!(report.outcome, NavigationOutcome::NotHandled);
    assert!(out.is_empty());
}

#[test]
fn stray_byte_in_utf8_gemtext_still_renders() {
    let client = MockClient::default()
        .pinned("example.org:1965")
        .serve("gemini://example.org/", b"20 text/gemini; charset=utf-8\r\n# Caf\xe9\nmenu\n");
    let mut navigator = navigator(client);

    let (report, page) = open(&mut navigator, "gemini://example.org/");

    assert!(report.is_handled());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, ErrorKind::UnsupportedEncoding);
    assert!(page.contains("<h1>Caf\u{fffd}</h1>"));
    assert!(page.contains("<p>menu</p>"));
}
