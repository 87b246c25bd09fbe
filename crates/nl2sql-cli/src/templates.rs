pub const GITIGNORE: &str = "/.nl2sql/\n/results/\n/logs/\npredictions.json\n*.db-shm\n*.db-wal\n";
