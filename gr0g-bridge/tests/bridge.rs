//! End-to-end tests against mock backends and an in-process peripheral
//! stack.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::Mutex;

use gr0g_bridge::advertisement::Advertisement;
use gr0g_bridge::bootstrap::{self, BootstrapError, BootstrapState};
use gr0g_bridge::fault::Fault;
use gr0g_bridge::service::{Application, Characteristic, Service};
use gr0g_bridge::stack::{AdapterId, PairingAgent, PeripheralStack};
use gr0g_bridge::rpc::RpcError;
use gr0g_bridge::{RestClient, RpcClient};
use gr0g_proto::async_io::{read_frame, write_frame};
use gr0g_proto::ble;
use gr0g_proto::{Frame, Request, Response};

const TIMEOUT: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Mock REST backend (hyper, serving /status and /status/cmds)
// ---------------------------------------------------------------------------

type RecordedCmds = Arc<Mutex<Vec<serde_json::Value>>>;

async fn spawn_rest_backend(status: serde_json::Value) -> (String, RecordedCmds) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cmds: RecordedCmds = Arc::new(Mutex::new(Vec::new()));
    let recorded = cmds.clone();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let io = hyper_util::rt::TokioIo::new(stream);
            let status = status.clone();
            let recorded = recorded.clone();
            tokio::spawn(async move {
                let builder = hyper_util::server::conn::auto::Builder::new(
                    hyper_util::rt::tokio::TokioExecutor::new(),
                );
                let _ = builder
                    .serve_connection(
                        io,
                        hyper::service::service_fn(move |r| {
                            handle_rest(r, status.clone(), recorded.clone())
                        }),
                    )
                    .await;
            });
        }
    });

    (format!("http://{addr}"), cmds)
}

async fn handle_rest(
    r: hyper::Request<hyper::body::Incoming>,
    status: serde_json::Value,
    recorded: RecordedCmds,
) -> Result<hyper::Response<Full<Bytes>>, std::convert::Infallible> {
    let response = match (r.method(), r.uri().path()) {
        (&hyper::Method::GET, "/status") => json_response(&status),
        (&hyper::Method::POST, "/status/cmds") => {
            let body = r.into_body().collect().await.unwrap().to_bytes();
            let cmd: serde_json::Value = serde_json::from_slice(&body).unwrap();
            recorded.lock().await.push(cmd);
            json_response(&serde_json::json!({}))
        }
        _ => {
            let mut response = hyper::Response::new(Full::new(Bytes::new()));
            *response.status_mut() = hyper::StatusCode::NOT_FOUND;
            response
        }
    };
    Ok(response)
}

fn json_response(value: &serde_json::Value) -> hyper::Response<Full<Bytes>> {
    hyper::Response::new(Full::new(Bytes::from(serde_json::to_vec(value).unwrap())))
}

// ---------------------------------------------------------------------------
// Mock RPC backend (control socket speaking gr0g-proto frames)
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum RpcMode {
    /// Answer `status` with this snapshot and any command with `ok`
    Status(serde_json::Value),
    /// Reject every command
    Reject(String),
    /// Accept the connection, read the request, never reply
    Silent,
}

type RecordedRequests = Arc<Mutex<Vec<Request>>>;

fn spawn_rpc_backend(path: &Path, mode: RpcMode) -> RecordedRequests {
    let listener = UnixListener::bind(path).unwrap();
    let requests: RecordedRequests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let mode = mode.clone();
            let recorded = recorded.clone();
            tokio::spawn(async move {
                let Ok(frame) = read_frame(&mut stream).await else {
                    return;
                };
                let request: Request = serde_json::from_slice(&frame.payload).unwrap();
                recorded.lock().await.push(request.clone());

                let response = match &mode {
                    RpcMode::Status(data) if request.cmd == ble::commands::STATUS => {
                        Response::ok(data.clone())
                    }
                    RpcMode::Status(_) => Response::ok(serde_json::json!({})),
                    RpcMode::Reject(msg) => Response::err(msg.clone()),
                    RpcMode::Silent => {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        return;
                    }
                };
                let _ = write_frame(&mut stream, &Frame::response(&response).unwrap()).await;
            });
        }
    });

    requests
}

struct RpcFixture {
    _dir: tempfile::TempDir,
    socket: PathBuf,
    requests: RecordedRequests,
}

fn rpc_fixture(mode: RpcMode) -> RpcFixture {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("gr0g.sock");
    let requests = spawn_rpc_backend(&socket, mode);
    RpcFixture {
        _dir: dir,
        socket,
        requests,
    }
}

fn rpc_client(fixture: &RpcFixture) -> Arc<RpcClient> {
    Arc::new(RpcClient::new(&fixture.socket, TIMEOUT))
}

fn lookup(application: &Application, uuid: &str) -> bool {
    application
        .characteristic(uuid.parse().unwrap())
        .is_some()
}

fn characteristic<'a>(application: &'a Application, uuid: &str) -> &'a Characteristic {
    application
        .characteristic(uuid.parse().unwrap())
        .expect("characteristic not mounted")
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn light_read_encodes_backend_value() {
    let fixture = rpc_fixture(RpcMode::Status(serde_json::json!({ "light": 42.0 })));
    let application = Application::new(Service::status(rpc_client(&fixture)));

    let light = characteristic(&application, ble::LIGHT_LEVEL_UUID);
    let value = light.read().await.unwrap();
    assert_eq!(value, 42.0f64.to_ne_bytes().to_vec());
}

#[tokio::test]
async fn gauge_read_falls_back_to_previous_value_when_backend_dies() {
    let fixture = rpc_fixture(RpcMode::Status(serde_json::json!({ "temperature": 21.25 })));
    let application = Application::new(Service::status(rpc_client(&fixture)));
    let temperature = characteristic(&application, ble::TEMPERATURE_UUID);

    let healthy = temperature.read().await.unwrap();
    assert_eq!(healthy, 21.25f64.to_ne_bytes().to_vec());

    // Connects now fail; both subsequent reads return the last good value.
    std::fs::remove_file(&fixture.socket).unwrap();
    assert_eq!(temperature.read().await.unwrap(), healthy);
    assert_eq!(temperature.read().await.unwrap(), healthy);
}

#[tokio::test]
async fn fan_read_returns_backend_state() {
    let (base, _cmds) = spawn_rest_backend(serde_json::json!({ "fan": "ON" })).await;
    let rest = Arc::new(RestClient::new(base, TIMEOUT).unwrap());
    let fan = Characteristic::fan_state(rest);

    assert_eq!(fan.read().await.unwrap(), b"ON".to_vec());
}

#[tokio::test]
async fn fan_read_uses_sentinel_on_backend_failure() {
    // Nothing listens on this port.
    let rest = Arc::new(RestClient::new("http://127.0.0.1:9", TIMEOUT).unwrap());
    let fan = Characteristic::fan_state(rest);

    assert_eq!(fan.read().await.unwrap(), b"UNKNOWN".to_vec());
    assert_eq!(fan.read().await.unwrap(), b"UNKNOWN".to_vec());
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fan_write_posts_lower_cased_command() {
    let (base, cmds) = spawn_rest_backend(serde_json::json!({ "fan": "OFF" })).await;
    let rest = Arc::new(RestClient::new(base, TIMEOUT).unwrap());
    let fan = Characteristic::fan_state(rest);

    fan.write(b"ON").await.unwrap();
    assert_eq!(
        cmds.lock().await.as_slice(),
        &[serde_json::json!({ "cmd": "on" })]
    );
}

#[tokio::test]
async fn fan_write_rejects_unknown_state_without_backend_call() {
    let (base, cmds) = spawn_rest_backend(serde_json::json!({ "fan": "OFF" })).await;
    let rest = Arc::new(RestClient::new(base, TIMEOUT).unwrap());
    let fan = Characteristic::fan_state(rest);

    assert_eq!(fan.write(b"FAST").await, Err(Fault::NotPermitted));
    assert!(cmds.lock().await.is_empty());
}

#[tokio::test]
async fn light_switch_accepts_tri_state_and_updates_last_value() {
    let fixture = rpc_fixture(RpcMode::Status(serde_json::json!({})));
    let application = Application::new(Service::status(rpc_client(&fixture)));
    let switch = characteristic(&application, ble::LIGHT_SWITCH_UUID);

    assert_eq!(switch.read().await.unwrap(), vec![0]);
    switch.write(b"1").await.unwrap();
    assert_eq!(switch.read().await.unwrap(), vec![1]);

    let requests = fixture.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].cmd, ble::commands::SET_LIGHT);
    assert_eq!(requests[0].args["state"], "1");
}

#[tokio::test]
async fn light_switch_rejects_invalid_state_and_keeps_value() {
    let fixture = rpc_fixture(RpcMode::Status(serde_json::json!({})));
    let application = Application::new(Service::status(rpc_client(&fixture)));
    let switch = characteristic(&application, ble::LIGHT_SWITCH_UUID);

    assert_eq!(switch.write(b"3").await, Err(Fault::NotPermitted));
    assert_eq!(switch.write(b"on").await, Err(Fault::NotPermitted));
    assert_eq!(switch.read().await.unwrap(), vec![0]);
    assert!(fixture.requests.lock().await.is_empty());
}

#[tokio::test]
async fn temperature_setpoint_write_submits_double() {
    let fixture = rpc_fixture(RpcMode::Status(serde_json::json!({})));
    let application = Application::new(Service::status(rpc_client(&fixture)));
    let setpoint = characteristic(&application, ble::TEMPERATURE_SETPOINT_UUID);

    setpoint.write(&21.5f64.to_ne_bytes()).await.unwrap();

    let requests = fixture.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].cmd, ble::commands::TEMPERATURE_SETPOINT);
    assert_eq!(requests[0].args["value"], 21.5);
}

#[tokio::test]
async fn temperature_setpoint_rejects_wrong_lengths() {
    let fixture = rpc_fixture(RpcMode::Status(serde_json::json!({})));
    let application = Application::new(Service::status(rpc_client(&fixture)));
    let setpoint = characteristic(&application, ble::TEMPERATURE_SETPOINT_UUID);

    assert_eq!(setpoint.write(&[0; 4]).await, Err(Fault::InvalidValueLength));
    assert_eq!(setpoint.write(&[0; 9]).await, Err(Fault::InvalidValueLength));
    assert!(fixture.requests.lock().await.is_empty());
}

#[tokio::test]
async fn humidity_setpoint_reads_double_but_writes_integer() {
    let fixture = rpc_fixture(RpcMode::Status(
        serde_json::json!({ "humidity_setpoint": 40.0 }),
    ));
    let application = Application::new(Service::status(rpc_client(&fixture)));
    let setpoint = characteristic(&application, ble::HUMIDITY_SETPOINT_UUID);

    assert_eq!(
        setpoint.read().await.unwrap(),
        40.0f64.to_ne_bytes().to_vec()
    );

    setpoint.write(&55i32.to_ne_bytes()).await.unwrap();
    assert_eq!(
        setpoint.write(&55.0f64.to_ne_bytes()).await,
        Err(Fault::InvalidValueLength)
    );

    let requests = fixture.requests.lock().await;
    // The status fetch for the read, then exactly one accepted command.
    let command = requests
        .iter()
        .find(|request| request.cmd == ble::commands::HUMIDITY_SETPOINT)
        .unwrap();
    assert_eq!(command.args["value"], 55);
    assert_eq!(
        requests
            .iter()
            .filter(|request| request.cmd == ble::commands::HUMIDITY_SETPOINT)
            .count(),
        1
    );
}

#[tokio::test]
async fn write_surfaces_failed_when_backend_rejects() {
    let fixture = rpc_fixture(RpcMode::Reject("light relay offline".to_string()));
    let application = Application::new(Service::status(rpc_client(&fixture)));
    let switch = characteristic(&application, ble::LIGHT_SWITCH_UUID);

    assert_eq!(switch.write(b"1").await, Err(Fault::Failed));
    // State is untouched after the failed submission.
    assert_eq!(switch.read().await.unwrap(), vec![0]);
}

#[tokio::test]
async fn write_to_read_only_characteristic_is_not_supported() {
    let fixture = rpc_fixture(RpcMode::Status(serde_json::json!({})));
    let application = Application::new(Service::status(rpc_client(&fixture)));
    let temperature = characteristic(&application, ble::TEMPERATURE_UUID);

    assert_eq!(
        temperature.write(&21.5f64.to_ne_bytes()).await,
        Err(Fault::NotSupported)
    );
    assert!(fixture.requests.lock().await.is_empty());
}

// ---------------------------------------------------------------------------
// Tree shape and descriptors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tree_mounts_fixed_order_without_fan() {
    let fixture = rpc_fixture(RpcMode::Status(serde_json::json!({})));
    let service = Service::status(rpc_client(&fixture));

    let uuids: Vec<String> = service
        .characteristics
        .iter()
        .map(|characteristic| characteristic.uuid.to_string())
        .collect();
    assert_eq!(
        uuids,
        vec![
            ble::LIGHT_LEVEL_UUID,
            ble::LIGHT_SWITCH_UUID,
            ble::TEMPERATURE_UUID,
            ble::TEMPERATURE_SETPOINT_UUID,
            ble::HUMIDITY_UUID,
            ble::HUMIDITY_SETPOINT_UUID,
        ]
    );

    let application = Application::new(service);
    assert!(!lookup(&application, ble::FAN_STATE_UUID));
}

#[tokio::test]
async fn tree_with_fan_mounts_it_first() {
    let (base, _cmds) = spawn_rest_backend(serde_json::json!({})).await;
    let rest = Arc::new(RestClient::new(base, TIMEOUT).unwrap());
    let fixture = rpc_fixture(RpcMode::Status(serde_json::json!({})));

    let service = Service::status_with_fan(rest, rpc_client(&fixture));
    assert_eq!(service.characteristics.len(), 7);
    assert_eq!(
        service.characteristics[0].uuid.to_string(),
        ble::FAN_STATE_UUID
    );
}

#[tokio::test]
async fn descriptor_reads_description_and_refuses_writes() {
    let fixture = rpc_fixture(RpcMode::Status(serde_json::json!({})));
    let application = Application::new(Service::status(rpc_client(&fixture)));
    let temperature = characteristic(&application, ble::TEMPERATURE_UUID);

    let descriptor = &temperature.descriptors[0];
    assert_eq!(descriptor.uuid.to_string(), ble::USER_DESCRIPTION_UUID);
    assert_eq!(descriptor.read(), ble::descriptions::TEMPERATURE.as_bytes());
    assert_eq!(descriptor.write(b"nope"), Err(Fault::NotPermitted));
}

// ---------------------------------------------------------------------------
// Backend client behavior
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rpc_call_times_out_against_silent_backend() {
    let fixture = rpc_fixture(RpcMode::Silent);
    let client = RpcClient::new(&fixture.socket, Duration::from_millis(200));

    let started = std::time::Instant::now();
    let err = client.status().await.unwrap_err();
    assert!(matches!(err, RpcError::Timeout(_)));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn rpc_client_surfaces_backend_rejection() {
    let fixture = rpc_fixture(RpcMode::Reject("fan relay offline".to_string()));
    let client = RpcClient::new(&fixture.socket, TIMEOUT);

    let err = client
        .cmd(ble::commands::SET_LIGHT, serde_json::json!({ "state": "1" }))
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Rejected(ref msg) if msg == "fan relay offline"));
}

#[tokio::test]
async fn rest_call_times_out_against_silent_backend() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // Accept and hold the connection open without ever responding.
        let _keep = listener.accept().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let rest = RestClient::new(format!("http://{addr}"), Duration::from_millis(200)).unwrap();
    let started = std::time::Instant::now();
    assert!(rest.status().await.is_err());
    assert!(started.elapsed() < Duration::from_secs(2));
}

// ---------------------------------------------------------------------------
// Bootstrap sequencer
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeStack {
    adapter: Option<AdapterId>,
    fail_advertisement: bool,
    calls: Vec<&'static str>,
    advertisement: Option<Advertisement>,
    application: Option<Arc<Application>>,
}

impl FakeStack {
    fn with_adapter() -> Self {
        Self {
            adapter: Some(AdapterId("hci0".to_string())),
            ..Self::default()
        }
    }
}

impl PeripheralStack for FakeStack {
    type Error = String;

    async fn find_adapter(&mut self) -> Result<Option<AdapterId>, Self::Error> {
        self.calls.push("find_adapter");
        Ok(self.adapter.clone())
    }

    async fn power_on(&mut self, _adapter: &AdapterId) -> Result<(), Self::Error> {
        self.calls.push("power_on");
        Ok(())
    }

    async fn register_advertisement(
        &mut self,
        _adapter: &AdapterId,
        advertisement: Advertisement,
    ) -> Result<(), Self::Error> {
        self.calls.push("register_advertisement");
        if self.fail_advertisement {
            return Err("advertisement quota exceeded".to_string());
        }
        self.advertisement = Some(advertisement);
        Ok(())
    }

    async fn register_application(
        &mut self,
        _adapter: &AdapterId,
        application: Arc<Application>,
    ) -> Result<(), Self::Error> {
        self.calls.push("register_application");
        self.application = Some(application);
        Ok(())
    }

    async fn register_agent(&mut self, _agent: &PairingAgent) -> Result<(), Self::Error> {
        self.calls.push("register_agent");
        Ok(())
    }

    async fn request_default_agent(&mut self, _agent: &PairingAgent) -> Result<(), Self::Error> {
        self.calls.push("request_default_agent");
        Ok(())
    }

    async fn serve(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

fn test_application() -> Arc<Application> {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("gr0g.sock");
    let rpc = Arc::new(RpcClient::new(socket, TIMEOUT));
    Arc::new(Application::new(Service::status(rpc)))
}

#[tokio::test]
async fn bootstrap_reaches_running_in_order() {
    let mut stack = FakeStack::with_adapter();
    let agent = PairingAgent::default();

    let state = bootstrap::run(
        &mut stack,
        Advertisement::gr0g(),
        test_application(),
        &agent,
    )
    .await
    .unwrap();

    assert_eq!(state, BootstrapState::Running);
    assert_eq!(
        stack.calls,
        vec![
            "find_adapter",
            "power_on",
            "register_advertisement",
            "register_application",
            "register_agent",
            "request_default_agent",
        ]
    );
    assert_eq!(stack.advertisement, Some(Advertisement::gr0g()));

    let application = stack.application.expect("application not registered");
    assert!(lookup(&application, ble::LIGHT_LEVEL_UUID));
}

#[tokio::test]
async fn bootstrap_without_adapter_never_registers() {
    let mut stack = FakeStack::default();
    let agent = PairingAgent::default();

    let err = bootstrap::run(
        &mut stack,
        Advertisement::gr0g(),
        test_application(),
        &agent,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, BootstrapError::NoAdapter));
    assert_eq!(stack.calls, vec!["find_adapter"]);
    assert!(stack.application.is_none());
}

#[tokio::test]
async fn bootstrap_stops_at_failed_advertisement() {
    let mut stack = FakeStack {
        fail_advertisement: true,
        ..FakeStack::with_adapter()
    };
    let agent = PairingAgent::default();

    let err = bootstrap::run(
        &mut stack,
        Advertisement::gr0g(),
        test_application(),
        &agent,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, BootstrapError::Advertisement(_)));
    assert!(!stack.calls.contains(&"register_application"));
    assert!(stack.application.is_none());
}
