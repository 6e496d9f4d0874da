//! Default configuration template printed by `freshcve --print-config`.

/// A complete, commented TOML configuration with the built-in source types.
pub const DEFAULT_CONFIG: &str = r#"# Address and port to listen on
# address: TCP address to listen on (default: all interfaces)
# port: TCP port to listen on (default: 8080)
# endpoint: path of the read endpoint (default: /api/v1/cves)
[server]
address = "localhost"
port = 8080
endpoint = "/api/v1/cves"

# Log configuration
# file: name of log file. If absent, output goes to stderr
# level: trace, debug, info, warn, error, fatal, panic (default: info)
[log]
level = "info"

[timers]
# Timeout for requests sent to sources (seconds)
request_timeout = 2

# Period between cache updates (seconds)
cache_update_interval = 60

# Persisted snapshot, read at startup and written on shutdown
[cache]
path = "cache.db"

# Source types map fields of the source JSON records to item fields.
# Only JSON array payloads are supported.
[sources_types.circl]
id = "id"
published = "Published"
references = "references"
description = "summary"

[sources_types.redhat]
id = "CVE"
published = "public_date"
references = "resource_url"
description = "bugzilla_description"

# List of CVE sources. The type must match one of the source types above.
[[sources]]
name = "circl source (last two days)"
url = "https://cve.circl.lu/api/last/2"
type = "circl"

[[sources]]
name = "redhat source"
url = "https://access.redhat.com/labs/securitydataapi/cve.json"
type = "redhat"
# Additional query string rendered on every fetch. On 5 May 2018,
# ?after={{ lastNDays 2 "%Y-%m-%d" }} produces ?after=2018-05-03
query_param = '?after={{ lastNDays 2 "%Y-%m-%d" }}'
"#;
