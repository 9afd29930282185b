//! Integration tests for the site-kit CLI

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn site_kit() -> Command {
        let mut cmd = cargo_bin_cmd!("site-kit");
        cmd.env_remove("GITHUB_ACTIONS")
            .env_remove("GITHUB_REPOSITORY")
            .env_remove("CUSTOM_DOMAIN")
            .env_remove("RUST_LOG");
        cmd
    }

    /// A project with one rendered page and no site-kit.toml, so defaults apply
    fn project(html: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        fs::write(dir.path().join("dist/index.html"), html).unwrap();
        dir
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn help_displays() {
        site_kit()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("image derivatives"));
    }

    #[test]
    fn version_displays() {
        site_kit()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("site-kit"));
    }

    #[test]
    fn build_without_output_fails() {
        let dir = TempDir::new().unwrap();
        site_kit()
            .arg("build")
            .arg(dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Output directory does not exist"));
    }

    #[test]
    fn build_generates_placeholder_for_missing_source() {
        let dir = project(r#"<img src="/assets/images/hero.jpg?size=200x100" alt="Hero">"#);

        site_kit()
            .arg("build")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("Generated placeholders: 1"))
            .stdout(predicate::str::contains("hero.jpg (used in index.html)"));

        assert!(dir.path().join(".temp/images/hero-200x100.jpg").is_file());
        assert!(dir.path().join("dist/assets/images/hero-200x100.jpg").is_file());
        assert!(dir.path().join(".temp/image-cache.json").is_file());

        let html = fs::read_to_string(dir.path().join("dist/index.html")).unwrap();
        assert_eq!(html, r#"<img src="/assets/images/hero-200x100.jpg" alt="Hero">"#);
    }

    #[test]
    fn build_derives_from_real_source() {
        let dir = project(r#"<img src="/assets/images/team/john.png?size=40x20&format=webp">"#);
        write_png(&dir.path().join("src/assets/images/team/john.png"), 80, 80);

        site_kit()
            .arg("build")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("1 processed, 0 cached, 0 placeholders"));

        let published = dir.path().join("dist/assets/images/team/john-40x20.webp");
        let derived = image::open(&published).unwrap();
        assert_eq!((derived.width(), derived.height()), (40, 20));
        assert!(dir.path().join("dist/assets/images/team/john.png").is_file());

        let html = fs::read_to_string(dir.path().join("dist/index.html")).unwrap();
        assert!(html.contains(r#"src="/assets/images/team/john-40x20.webp""#));
    }

    #[test]
    fn second_build_hits_cache() {
        let dir = project(r#"<img src="/assets/images/logo.png?size=10x10">"#);
        write_png(&dir.path().join("src/assets/images/logo.png"), 20, 20);

        site_kit().arg("build").arg(dir.path()).assert().success();

        // Restore the request so the second run sees it again
        fs::write(
            dir.path().join("dist/index.html"),
            r#"<img src="/assets/images/logo.png?size=10x10">"#,
        )
        .unwrap();

        site_kit()
            .arg("build")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("0 processed, 1 cached, 0 placeholders"));
    }

    #[test]
    fn build_applies_base_path() {
        let dir = project(r#"<a href="/en/">English</a>"#);

        site_kit()
            .args(["build", "--no-images", "--base-path", "website"])
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("Base path /website applied to 1 pages"));

        let html = fs::read_to_string(dir.path().join("dist/index.html")).unwrap();
        assert_eq!(html, r#"<a href="/website/en/">English</a>"#);
    }

    #[test]
    fn build_writes_cname_for_custom_domain() {
        let dir = project("<p>hello</p>");

        site_kit()
            .args(["build", "--no-images"])
            .arg(dir.path())
            .env("CUSTOM_DOMAIN", "example.no")
            .assert()
            .success();

        assert_eq!(
            fs::read_to_string(dir.path().join("dist/CNAME")).unwrap(),
            "example.no"
        );
    }

    #[test]
    fn scan_lists_requests() {
        let dir = project(r#"<img src="/assets/images/hero.jpg?size=200x100">"#);

        site_kit()
            .arg("scan")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("1 image requests in 1 pages"))
            .stdout(predicate::str::contains("hero.jpg@200x100"))
            .stdout(predicate::str::contains("missing"));

        // Scanning never writes anything
        assert!(!dir.path().join(".temp").exists());
    }

    #[test]
    fn scan_json() {
        let dir = project(r#"<img src="/assets/images/hero.jpg?size=200x100&format=webp">"#);

        let output = site_kit()
            .args(["scan", "--json"])
            .arg(dir.path())
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let requests: serde_json::Value = serde_json::from_slice(&output).unwrap();
        let request = &requests[0];
        assert_eq!(request["key"], "hero.jpg@200x100.webp");
        assert_eq!(request["url"], "/assets/images/hero-200x100.webp");
        assert_eq!(request["sourceExists"], false);
        assert_eq!(request["pages"][0], "index.html");
    }

    #[test]
    fn clean_removes_cache_and_derivatives() {
        let dir = project(r#"<img src="/assets/images/hero.jpg?size=20x10">"#);
        site_kit().arg("build").arg(dir.path()).assert().success();
        assert!(dir.path().join(".temp/image-cache.json").exists());

        site_kit()
            .arg("clean")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("Image cache cleared"));

        assert!(!dir.path().join(".temp/image-cache.json").exists());
        assert!(!dir.path().join(".temp/images").exists());
    }

    #[test]
    fn completions_generate() {
        site_kit()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("site-kit"));
    }
}
