//! asmr.one API 客户端。
//!
//! 登录状态保存在显式的 [`Session`] 值中，每次请求时按需附加 Bearer 凭证；
//! [`AuthedClient`] 把客户端与会话绑在一起，实现下载流水线需要的两个接口。

use async_trait::async_trait;
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, CONNECTION, CONTENT_LENGTH, ETAG, HeaderMap, HeaderValue, USER_AGENT,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::base_system::context::Config;
use crate::download::errors::{DownloadError, Result};
use crate::download::models::{TrackNode, WorkInfo};
use crate::download::transport::{BodyStream, ListingSource, ProbeResponse, Transport, Verb};

/// 登录态。匿名会话不携带凭证。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    username: Option<String>,
    token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    name: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Clone)]
pub struct AsmrApi {
    client: Client,
    api_base: String,
}

impl AsmrApi {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        // reqwest is built without decompression; ask for identity so Content-Length and
        // the MD5 ETag describe the bytes we actually receive.
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        if let Ok(ua) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, ua);
        }

        // 只限制连接建立时间；传输过程允许任意慢
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    fn request(&self, session: &Session, method: Method, url: &str) -> RequestBuilder {
        session.authorize(self.client.request(method, url))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let url = self.endpoint("auth/me");
        let resp = self
            .client
            .post(&url)
            .json(&LoginRequest {
                name: username,
                password,
            })
            .send()
            .await?;
        let resp = check_status(resp, &url)?;
        let body: LoginResponse = resp.json().await?;
        let token = body
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DownloadError::Auth("login response has no token".to_string()))?;

        info!(target: "network", username, "logged in");
        Ok(Session {
            username: Some(username.to_string()),
            token: Some(token),
        })
    }

    /// 注销后返回匿名会话。
    pub async fn logout(&self, session: &Session) -> Result<Session> {
        if !session.is_logged_in() {
            return Ok(Session::anonymous());
        }
        let url = self.endpoint("auth/reg");
        let resp = self.request(session, Method::GET, &url).send().await?;
        check_status(resp, &url)?;
        info!(target: "network", "logged out");
        Ok(Session::anonymous())
    }

    pub async fn get_work(&self, session: &Session, code: &str) -> Result<WorkInfo> {
        let url = self.endpoint(&format!("work/{code}"));
        let resp = self.request(session, Method::GET, &url).send().await?;
        Ok(check_status(resp, &url)?.json().await?)
    }

    pub async fn get_tracks(&self, session: &Session, code: &str) -> Result<Vec<TrackNode>> {
        let url = self.endpoint(&format!("tracks/{code}"));
        debug!(target: "network", url, "fetch track listing");
        let resp = self.request(session, Method::GET, &url).send().await?;
        Ok(check_status(resp, &url)?.json().await?)
    }

    pub async fn probe(&self, session: &Session, verb: Verb, url: &str) -> Result<ProbeResponse> {
        let method = match verb {
            Verb::Head => Method::HEAD,
            Verb::Get => Method::GET,
        };
        let resp = self.request(session, method, url).send().await?;
        let resp = check_status(resp, url)?;

        let headers = resp.headers();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let etag = headers
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match verb {
            Verb::Get => Some(Box::new(ResponseBody { resp }) as Box<dyn BodyStream>),
            Verb::Head => None,
        };
        Ok(ProbeResponse {
            content_length,
            etag,
            body,
        })
    }

    pub fn with_session(&self, session: Session) -> AuthedClient {
        AuthedClient {
            api: self.clone(),
            session,
        }
    }
}

fn check_status(resp: Response, url: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(DownloadError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

struct ResponseBody {
    resp: Response,
}

#[async_trait]
impl BodyStream for ResponseBody {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.resp.chunk().await?.map(|b| b.to_vec()))
    }
}

/// 绑定了会话的客户端。
#[derive(Clone)]
pub struct AuthedClient {
    api: AsmrApi,
    session: Session,
}

impl AuthedClient {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn get_work(&self, code: &str) -> Result<WorkInfo> {
        self.api.get_work(&self.session, code).await
    }
}

#[async_trait]
impl Transport for AuthedClient {
    async fn probe(&self, verb: Verb, url: &str) -> Result<ProbeResponse> {
        self.api.probe(&self.session, verb, url).await
    }
}

#[async_trait]
impl ListingSource for AuthedClient {
    async fn fetch_tracks(&self, work_id: &str) -> Result<Vec<TrackNode>> {
        self.api.get_tracks(&self.session, work_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use md5::{Digest, Md5};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::base_system::retry::testing::RecordingSleeper;
    use crate::base_system::retry::RetryPolicy;
    use crate::download::downloader::WorkDownloader;
    use crate::download::metadata::{ProbeOrder, resolve};
    use crate::download::progress::ProgressReporter;

    fn api_for(server: &MockServer) -> AsmrApi {
        let config = Config {
            api_base: format!("{}/api/", server.uri()),
            ..Config::default()
        };
        AsmrApi::new(&config).unwrap()
    }

    async fn logged_in(server: &MockServer) -> Session {
        Mock::given(method("POST"))
            .and(path("/api/auth/me"))
            .and(body_json(json!({"name": "listener", "password": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"name": "listener"},
                "token": "tok-123"
            })))
            .mount(server)
            .await;
        api_for(server).login("listener", "secret").await.unwrap()
    }

    #[tokio::test]
    async fn login_stores_token_on_session() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;
        assert!(session.is_logged_in());
        assert_eq!(session.username(), Some("listener"));
    }

    #[tokio::test]
    async fn login_without_token_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {}})))
            .mount(&server)
            .await;
        let err = api_for(&server).login("a", "b").await.unwrap_err();
        assert!(matches!(err, DownloadError::Auth(_)));
    }

    #[tokio::test]
    async fn rejected_login_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let err = api_for(&server).login("a", "b").await.unwrap_err();
        assert!(matches!(err, DownloadError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn tracks_request_carries_bearer_token() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/tracks/123456"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"type": "folder", "title": "Track 1", "children": [
                    {"type": "audio", "title": "01 Intro.mp3", "mediaDownloadUrl": "https://x/1"}
                ]}
            ])))
            .mount(&server)
            .await;

        let client = api_for(&server).with_session(session);
        let nodes = client.fetch_tracks("123456").await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].title, "Track 1");
    }

    #[tokio::test]
    async fn logout_returns_anonymous_session() {
        let server = MockServer::start().await;
        let session = logged_in(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/auth/reg"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let session = api_for(&server).logout(&session).await.unwrap();
        assert_eq!(session, Session::anonymous());
    }

    #[tokio::test]
    async fn get_probe_reads_length_and_etag() {
        let server = MockServer::start().await;
        let hash = hex::encode(Md5::digest(b"AAAAA"));
        Mock::given(method("GET"))
            .and(path("/media/1.mp3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("ETag", format!("\"{hash}\"").as_str())
                    .set_body_bytes(b"AAAAA".to_vec()),
            )
            .mount(&server)
            .await;

        let client = api_for(&server).with_session(Session::anonymous());
        let url = format!("{}/media/1.mp3", server.uri());
        let resolved = resolve(&client, &url, ProbeOrder::GetFirst).await.unwrap();
        assert_eq!(resolved.metadata.content_length, 5);
        assert_eq!(resolved.metadata.content_hash_hex, hash);
        assert!(resolved.body.is_some());
    }

    #[tokio::test]
    async fn server_error_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/2.mp3"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let client = api_for(&server).with_session(Session::anonymous());
        let url = format!("{}/media/2.mp3", server.uri());
        let err = client.probe(Verb::Get, &url).await.unwrap_err();
        assert!(matches!(err, DownloadError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn downloads_a_work_over_http() {
        let server = MockServer::start().await;
        let audio = b"RIFF fake wave data".to_vec();
        let hash = hex::encode(Md5::digest(&audio));
        Mock::given(method("GET"))
            .and(path("/api/tracks/123456"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"type": "folder", "title": "Track 1", "children": [
                    {"type": "audio", "title": "01 Intro.mp3",
                     "mediaDownloadUrl": format!("{}/media/intro.mp3", server.uri())}
                ]}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/intro.mp3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("ETag", format!("\"{hash}\"").as_str())
                    .set_body_bytes(audio.clone()),
            )
            .mount(&server)
            .await;

        let client = Arc::new(api_for(&server).with_session(Session::anonymous()));
        let downloader = WorkDownloader::new(
            client.clone(),
            client,
            Arc::new(RecordingSleeper::default()),
            RetryPolicy::default(),
        );
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = ProgressReporter::new(Some(Box::new(|_| {})));
        let result = downloader
            .download_work("123456", dir.path(), &mut reporter)
            .await
            .unwrap();

        assert_eq!(result.downloaded, 1);
        assert_eq!(
            std::fs::read(dir.path().join("Track 1/01 Intro.mp3")).unwrap(),
            audio
        );
    }
}
