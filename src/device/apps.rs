//! Human app names → Android package ids.
use std::collections::HashMap;

use crate::config::DeviceConfig;

const BUILTIN: &[(&str, &str)] = &[
    ("settings", "com.android.settings"),
    ("设置", "com.android.settings"),
    ("chrome", "com.android.chrome"),
    ("camera", "com.android.camera2"),
    ("wechat", "com.tencent.mm"),
    ("微信", "com.tencent.mm"),
    ("alipay", "com.eg.android.AlipayGphone"),
    ("支付宝", "com.eg.android.AlipayGphone"),
    ("taobao", "com.taobao.taobao"),
    ("淘宝", "com.taobao.taobao"),
    ("douyin", "com.ss.android.ugc.aweme"),
    ("抖音", "com.ss.android.ugc.aweme"),
    ("jd", "com.jingdong.app.mall"),
    ("京东", "com.jingdong.app.mall"),
    ("meituan", "com.sankuai.meituan"),
    ("美团", "com.sankuai.meituan"),
    ("eleme", "me.ele"),
    ("饿了么", "me.ele"),
    ("baidu", "com.baidu.searchbox"),
    ("百度", "com.baidu.searchbox"),
    ("amap", "com.autonavi.minimap"),
    ("高德地图", "com.autonavi.minimap"),
    ("qq", "com.tencent.mobileqq"),
    ("netease music", "com.netease.cloudmusic"),
    ("网易云音乐", "com.netease.cloudmusic"),
    ("bilibili", "tv.danmaku.bili"),
    ("哔哩哔哩", "tv.danmaku.bili"),
    ("b站", "tv.danmaku.bili"),
    ("toutiao", "com.ss.android.article.news"),
    ("今日头条", "com.ss.android.article.news"),
];

#[derive(Debug, Clone, Default)]
pub struct AppDirectory {
    custom: HashMap<String, String>,
    default_package: Option<String>,
}

impl AppDirectory {
    pub fn new(custom: HashMap<String, String>, default_package: Option<String>) -> Self {
        let custom = custom
            .into_iter()
            .map(|(name, pkg)| (name.to_lowercase(), pkg))
            .collect();
        Self {
            custom,
            default_package,
        }
    }

    pub fn from_config(cfg: &DeviceConfig) -> Self {
        Self::new(cfg.app_aliases.clone(), cfg.default_package.clone())
    }

    /// Package for `name`: configured aliases, then built-ins (exact, then
    /// containment either way), then anything that looks like a package id.
    /// `None` or a blank name selects the default package.
    pub fn resolve(&self, name: Option<&str>) -> Option<String> {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return self.default_package.clone();
        };
        let key = name.to_lowercase();

        if let Some(pkg) = self.custom.get(&key) {
            return Some(pkg.clone());
        }
        if let Some((_, pkg)) = BUILTIN.iter().find(|(alias, _)| *alias == key) {
            return Some(pkg.to_string());
        }
        if looks_like_package(name) {
            return Some(name.to_string());
        }
        BUILTIN
            .iter()
            .find(|(alias, _)| key.contains(alias) || alias.contains(key.as_str()))
            .map(|(_, pkg)| pkg.to_string())
    }
}

fn looks_like_package(name: &str) -> bool {
    name.contains('.')
        && !name.contains(char::is_whitespace)
        && name
            .split('.')
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}
