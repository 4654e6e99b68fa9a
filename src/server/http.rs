use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};

use axum::Router;
use tokio::net::TcpListener;

use crate::error::ApiResult;

pub struct HttpServer {
    addr: SocketAddr,
    svc: Router,
}

impl HttpServer {
    #[must_use]
    pub fn http(listen_addr: Ipv4Addr, listen_port: u16, svc: Router) -> Self {
        Self {
            addr: SocketAddr::from((listen_addr, listen_port)),
            svc,
        }
    }

    /// Serve until `shutdown` completes.
    pub async fn run<F>(self, shutdown: F) -> ApiResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        log::info!("Opening listen port on {}", self.addr);
        let listener = TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.svc)
            .with_graceful_shutdown(shutdown)
            .await?;
        log::info!("http server on {} stopped", self.addr);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use axum::Router;
    use axum::routing::get;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    use crate::server::http::HttpServer;

    #[tokio::test]
    async fn run_finishes_after_shutdown() {
        let (tx, rx) = oneshot::channel::<()>();
        let svc = Router::new().route("/", get(|| async { "ok" }));
        let server = HttpServer::http(Ipv4Addr::LOCALHOST, 0, svc);

        let task = tokio::spawn(server.run(async {
            let _ = rx.await;
        }));
        tx.send(()).unwrap();

        let res = timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert!(res.is_ok());
    }
}
