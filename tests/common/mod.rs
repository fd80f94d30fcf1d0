//! Shared test support: a scriptable mock runtime and a tiny HTTP server
//! for the smoke probe to hit.

use async_trait::async_trait;
use gantry::runtime::{ContainerRuntime, ContainerSpec, ImageRecord, RuntimeError};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const NGINX_TOP: &str = "\
UID  PID  PPID  C  STIME  TTY  TIME      CMD
root 1    0     0  10:00  ?    00:00:00  nginx: master process nginx -g daemon off;
nginx 29  1     0  10:00  ?    00:00:00  nginx: worker process";

const NODE_TOP: &str = "\
UID  PID  PPID  C  STIME  TTY  TIME      CMD
node 1    0     0  10:00  ?    00:00:02  /usr/local/bin/node /app/server.js";

#[derive(Default)]
struct MockState {
    calls: Mutex<Vec<String>>,
    fail_ops: Mutex<HashSet<String>>,
    // container name -> running?
    containers: Mutex<HashMap<String, bool>>,
    images: Mutex<Vec<ImageRecord>>,
}

/// In-memory container runtime that records every call
///
/// Clones share state, so tests can hand one clone to the engine and keep
/// another for assertions.
#[derive(Clone, Default)]
pub struct MockRuntime {
    state: Arc<MockState>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make one operation fail from now on
    pub fn fail_on(&self, op: &str) {
        self.state.fail_ops.lock().unwrap().insert(op.to_string());
    }

    /// Every recorded call, in order
    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().unwrap().clone()
    }

    /// Names of containers currently running
    pub fn running_containers(&self) -> Vec<String> {
        let containers = self.state.containers.lock().unwrap();
        let mut running: Vec<String> = containers
            .iter()
            .filter(|(_, is_running)| **is_running)
            .map(|(name, _)| name.clone())
            .collect();
        running.sort();
        running
    }

    /// Seed the image listing
    pub fn set_images(&self, images: Vec<ImageRecord>) {
        *self.state.images.lock().unwrap() = images;
    }

    fn record(&self, call: String) {
        self.state.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: &str) -> Result<(), RuntimeError> {
        if self.state.fail_ops.lock().unwrap().contains(op) {
            return Err(RuntimeError::CommandFailed {
                command: op.to_string(),
                code: 1,
                stderr: "mock failure".to_string(),
            });
        }
        Ok(())
    }

    fn missing(&self, name: &str) -> RuntimeError {
        RuntimeError::CommandFailed {
            command: format!("docker {}", name),
            code: 1,
            stderr: format!("No such container: {}", name),
        }
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn build_image(
        &self,
        _context: &Path,
        _dockerfile: &Path,
        target: &str,
        tag: &str,
    ) -> Result<(), RuntimeError> {
        self.record(format!("build {} {}", target, tag));
        self.check("build_image")
    }

    async fn tag_image(&self, source: &str, target: &str) -> Result<(), RuntimeError> {
        self.record(format!("tag {} {}", source, target));
        self.check("tag_image")
    }

    async fn run_detached(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        self.record(format!("run {}", spec.name));
        self.check("run_detached")?;

        let mut containers = self.state.containers.lock().unwrap();
        if containers.get(&spec.name) == Some(&true) {
            // Same failure the engine reports on a name collision
            return Err(RuntimeError::CommandFailed {
                command: format!("docker run {}", spec.name),
                code: 125,
                stderr: format!("Conflict. The container name \"{}\" is already in use", spec.name),
            });
        }
        containers.insert(spec.name.clone(), true);
        Ok(())
    }

    async fn stop_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.record(format!("stop {}", name));
        self.check("stop_container")?;

        let mut containers = self.state.containers.lock().unwrap();
        match containers.get_mut(name) {
            Some(running) if *running => {
                *running = false;
                Ok(())
            }
            _ => Err(self.missing(name)),
        }
    }

    async fn remove_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.record(format!("rm {}", name));
        self.check("remove_container")?;

        let mut containers = self.state.containers.lock().unwrap();
        match containers.remove(name) {
            Some(_) => Ok(()),
            None => Err(self.missing(name)),
        }
    }

    async fn container_running(&self, name: &str) -> Result<bool, RuntimeError> {
        self.record(format!("ps {}", name));
        self.check("container_running")?;
        Ok(self.state.containers.lock().unwrap().get(name) == Some(&true))
    }

    async fn container_processes(&self, name: &str) -> Result<String, RuntimeError> {
        self.record(format!("top {}", name));
        self.check("container_processes")?;

        if self.state.containers.lock().unwrap().get(name) != Some(&true) {
            return Err(self.missing(name));
        }
        if name.contains("-prod-") {
            Ok(NGINX_TOP.to_string())
        } else {
            Ok(NODE_TOP.to_string())
        }
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<ImageRecord>, RuntimeError> {
        self.record(format!("images {}", repository));
        self.check("list_images")?;
        Ok(self.state.images.lock().unwrap().clone())
    }

    async fn remove_dangling_images(&self) -> Result<usize, RuntimeError> {
        self.record("rmi-dangling".to_string());
        self.check("remove_dangling_images")?;
        Ok(2)
    }

    async fn push_image(&self, reference: &str) -> Result<(), RuntimeError> {
        self.record(format!("push {}", reference));
        self.check("push_image")
    }

    async fn compose_up(&self, file: &Path) -> Result<(), RuntimeError> {
        self.record(format!("compose-up {}", file.display()));
        self.check("compose_up")
    }

    async fn compose_down(&self, file: &Path) -> Result<(), RuntimeError> {
        self.record(format!("compose-down {}", file.display()));
        self.check("compose_down")
    }
}

/// Serve a fixed status on an ephemeral port; returns the port
pub async fn spawn_http_server(status: u16) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let port = listener.local_addr().expect("local addr").port();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let reason = match status {
                    200 => "OK",
                    500 => "Internal Server Error",
                    _ => "Status",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok",
                    status, reason
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    port
}
