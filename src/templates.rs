//! Templates for files written during JRE installation

use std::path::Path;

/// Generate the silent-install response file consumed by the JRE installer
pub fn generate_response_file(install_dir: &Path) -> String {
    format!(
        "INSTALLER_UI=silent\nUSER_INSTALL_DIR={}\nLICENSE_ACCEPTED=TRUE\n",
        install_dir.display()
    )
}

/// Generate the profile script that exposes the installed JRE to the app
pub fn generate_profile_script(java_home: &Path, java_opts: &str) -> String {
    format!(
        "export JAVA_HOME=\"{}\"\nexport PATH=\"$JAVA_HOME/bin:$PATH\"\nexport JAVA_OPTS=\"{}\"\n",
        java_home.display(),
        java_opts.replace('"', "\\\"")
    )
}
