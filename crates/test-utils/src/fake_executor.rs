use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use barliman::engine::{RuntimeEvent, ScheduledQuery};
use barliman::errors::Result;
use barliman::exec::{ExecutorBackend, ProcessOutput};
use barliman::types::{QueryKind, TaskId, TaskRef};

/// How the fake interpreter answers a query.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Exit after `after` with this output.
    Output {
        stdout: String,
        exit_code: i32,
        after: Duration,
    },
    /// Never exit on its own.
    Hang,
    /// Fail to start.
    SpawnFails(String),
}

impl Reply {
    pub fn ok(stdout: &str, after: Duration) -> Self {
        Reply::Output {
            stdout: stdout.to_string(),
            exit_code: 0,
            after,
        }
    }

    pub fn exit(exit_code: i32, after: Duration) -> Self {
        Reply::Output {
            stdout: String::new(),
            exit_code,
            after,
        }
    }
}

/// What the fake executor saw.
#[derive(Debug, Default)]
pub struct ExecutionLog {
    pub spawned: Vec<ScheduledQuery>,
    pub cancelled: Vec<TaskRef>,
    /// Spawns that found another task of the same kind still running.
    pub overlaps: usize,
    running: HashMap<QueryKind, TaskId>,
}

impl ExecutionLog {
    pub fn spawned_kinds(&self) -> Vec<QueryKind> {
        self.spawned.iter().map(|q| q.task.kind).collect()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }
}

/// A fake executor that:
/// - records which queries were "run" and which were cancelled
/// - answers each kind with a scripted `Reply`, after a (Tokio) delay.
///
/// Cancelling a task drops its pending reply, like killing a process.
pub struct ScriptedExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    replies: HashMap<QueryKind, Reply>,
    default_reply: Reply,
    log: Arc<Mutex<ExecutionLog>>,
    pending: HashMap<TaskId, JoinHandle<()>>,
}

impl ScriptedExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            replies: HashMap::new(),
            default_reply: Reply::ok("(ok)", Duration::from_millis(100)),
            log: Arc::new(Mutex::new(ExecutionLog::default())),
            pending: HashMap::new(),
        }
    }

    pub fn reply(mut self, kind: QueryKind, reply: Reply) -> Self {
        self.replies.insert(kind, reply);
        self
    }

    pub fn default_reply(mut self, reply: Reply) -> Self {
        self.default_reply = reply;
        self
    }

    pub fn log(&self) -> Arc<Mutex<ExecutionLog>> {
        Arc::clone(&self.log)
    }

    fn start(&mut self, query: ScheduledQuery) {
        let task = query.task;
        {
            let mut log = self.log.lock().unwrap();
            if log.running.insert(task.kind, task.id).is_some() {
                log.overlaps += 1;
            }
            log.spawned.push(query);
        }

        let reply = self
            .replies
            .get(&task.kind)
            .cloned()
            .unwrap_or_else(|| self.default_reply.clone());
        let tx = self.runtime_tx.clone();
        let log = Arc::clone(&self.log);

        let handle = tokio::spawn(async move {
            let event = match reply {
                Reply::Hang => return std::future::pending().await,
                Reply::SpawnFails(error) => RuntimeEvent::TaskSpawnFailed { task, error },
                Reply::Output {
                    stdout,
                    exit_code,
                    after,
                } => {
                    tokio::time::sleep(after).await;
                    RuntimeEvent::TaskFinished {
                        task,
                        output: ProcessOutput {
                            stdout,
                            stderr: String::new(),
                            exit_code,
                            elapsed: after,
                        },
                    }
                }
            };
            release(&log, task);
            let _ = tx.send(event).await;
        });
        self.pending.insert(task.id, handle);
    }

    fn cancel(&mut self, task: TaskRef) {
        if let Some(handle) = self.pending.remove(&task.id) {
            handle.abort();
        }
        release(&self.log, task);
        self.log.lock().unwrap().cancelled.push(task);
    }
}

fn release(log: &Mutex<ExecutionLog>, task: TaskRef) {
    let mut log = log.lock().unwrap();
    if log.running.get(&task.kind) == Some(&task.id) {
        log.running.remove(&task.kind);
    }
}

impl ExecutorBackend for ScriptedExecutor {
    fn spawn_queries(
        &mut self,
        queries: Vec<ScheduledQuery>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for query in queries {
                self.start(query);
            }
            Ok(())
        })
    }

    fn cancel_tasks(
        &mut self,
        tasks: Vec<TaskRef>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for task in tasks {
                self.cancel(task);
            }
            Ok(())
        })
    }
}
