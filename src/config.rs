use std::env;
use std::path::PathBuf;

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub model_path: PathBuf,
    pub labels_path: Option<PathBuf>,
    pub body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Config {
        let bind_addr = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse::<u16>()
            .expect("PORT must be a valid number between 0 and 65535");

        let body_limit_bytes = {
            let mb = env::var("BODY_LIMIT_MB")
                .unwrap_or_else(|_| "5".into())
                .parse::<usize>()
                .expect("BODY_LIMIT_MB must be a valid integer");
            mb * 1024 * 1024
        };

        let upload_dir =
            PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "static/uploads".into()));

        let model_path =
            PathBuf::from(env::var("MODEL_PATH").unwrap_or_else(|_| "model.onnx".into()));

        let labels_path = env::var("LABELS_PATH").ok().map(PathBuf::from);

        Config {
            bind_addr,
            port,
            upload_dir,
            model_path,
            labels_path,
            body_limit_bytes,
        }
    }
}
