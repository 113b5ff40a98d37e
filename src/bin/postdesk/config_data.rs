use std::fs;
use std::io;
use std::path::Path;

const CONFIG_SAMPLE: &str = r#"# For the file locations, if you want them to be relative to the executable
# directory use ${exe_dir}/location. Relative content_dir, site_config and
# og_cache are taken from project_root.
[paths]
project_root = "{{CURRENT_DIR}}"
content_dir = "source/_posts"
site_config = "_config.yml"
og_cache = "og-cache.json"

# Keep the address on localhost: the API has no authentication
[server]
address = "127.0.0.1"
port = 4001

[og]
ttl_days = 7
timeout_secs = 10
user_agent = "bot"

# Remove this section to log to the console only
[log]
level = "Info"
log_to_console = true
# location = "${exe_dir}/log/server.log"
"#;

pub(crate) fn write_sample_cfg(file_path: &Path) -> io::Result<()> {
    if file_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", file_path.display())));
    }
    fs::write(file_path, get_sample_cfg()?)
}

fn get_sample_cfg() -> io::Result<String> {
    let current_dir = std::env::current_dir()?;
    let current_dir = current_dir.to_string_lossy().replace('\\', "/");
    Ok(CONFIG_SAMPLE.replace("{{CURRENT_DIR}}", &current_dir))
}
