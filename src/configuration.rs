use std::net::SocketAddr;

#[derive(Clone, Debug)]
pub struct Configuration {
    pub data_dir: String,
    pub log_file: Option<String>,
    pub reset: bool,
    pub api_listen: SocketAddr,
}
