pub const TABLES: [&str; 6] = [
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('student', 'supervisor', 'admin')),
        percentage INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        granted_hours REAL NOT NULL,
        quota INTEGER NOT NULL,
        supervisor TEXT NOT NULL REFERENCES users(email),
        status TEXT NOT NULL DEFAULT 'active'
            CHECK (status IN ('active', 'finished', 'cancelled')),
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS applications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES projects(id),
        student TEXT NOT NULL REFERENCES users(email),
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'accepted', 'rejected')),
        submitted_at TEXT NOT NULL,
        responded_at TEXT,
        rejection_reason TEXT,
        UNIQUE (project_id, student)
    )",
    "CREATE TABLE IF NOT EXISTS logged_hours (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        student TEXT NOT NULL REFERENCES users(email),
        project_id INTEGER REFERENCES projects(id),
        date TEXT NOT NULL,
        description TEXT NOT NULL,
        quantity REAL NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'approved', 'rejected')),
        year INTEGER NOT NULL,
        carried_from INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER REFERENCES projects(id),
        sender TEXT NOT NULL REFERENCES users(email),
        receiver TEXT REFERENCES users(email),
        body TEXT NOT NULL,
        sent_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        recipient TEXT NOT NULL REFERENCES users(email),
        body TEXT NOT NULL,
        created_at TEXT NOT NULL,
        read INTEGER NOT NULL DEFAULT 0,
        compliance_year INTEGER
    )",
];
