/*!
Example: errcode explanation helpers

Run:
  cargo run --example error_help
*/

use wxoa_rs::errors::{explain, lookup};

fn main() {
    let samples: Vec<(i64, &str)> = vec![
        (-1, "system error"),
        (0, "ok"),
        (40001, "invalid credential"),
        (40164, "invalid ip, not in whitelist"),
        (42001, "access_token expired"),
        (45009, "reach max api daily quota limit"),
        (123456, "unknown"),
        (47001, "data format error hint: Warning: wrong json format."),
    ];

    println!("== errcode explanation demo ==");
    for (code, errmsg) in samples {
        println!("\n- errcode={} errmsg='{}'\n  {}", code, errmsg, explain(code, errmsg));
        let help = lookup(code);
        println!(
            "  details: category={:?}, refresh_token={}",
            help.category, help.refresh_token
        );
    }
}
