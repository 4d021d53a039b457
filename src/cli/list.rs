use super::Session;

pub fn cmd_list(session: &Session) {
    let default = session.config.default_backend.as_deref();
    for name in session.registry.backends() {
        if Some(name.as_str()) == default {
            println!("{} (default)", name);
        } else {
            println!("{}", name);
        }
    }
}
