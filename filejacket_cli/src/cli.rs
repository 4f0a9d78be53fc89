use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 检视一个文件:运行抽取链并打印文件对象的属性
    Inspect {
        /// 要检视的本地文件路径
        #[arg(required = true)]
        path: PathBuf,

        /// 同时渲染并打印一段内容预览
        #[arg(short = 'p', long = "preview")]
        preview: bool,
    },
    /// 计算或校验文件的摘要
    Hash {
        /// 目标文件路径
        #[arg(required = true)]
        path: PathBuf,

        /// 校验内容与已记录的摘要是否一致,而不是重新计算
        #[arg(short = 'c', long = "check", conflicts_with_all = ["force", "write"])]
        check: bool,

        /// 忽略清单里已有的摘要,强制从内容重新计算
        #[arg(short = 'f', long = "force")]
        force: bool,

        /// 把摘要清单写到文件旁边
        #[arg(short = 'w', long = "write")]
        write: bool,
    },
    /// 为被占用的文件名挑选下一个空闲名字
    Rename {
        /// 目标文件路径
        #[arg(required = true)]
        path: PathBuf,

        /// 真正在磁盘上执行改名 (默认只预览)
        #[arg(long)]
        apply: bool,
    },
    /// 列出或解压一个归档文件
    #[command(visible_alias = "extract")]
    Unpack {
        /// 归档文件路径 (zip / tar / tar.gz)
        #[arg(required = true)]
        path: PathBuf,

        /// 只列出条目,不解压
        #[arg(short = 'l', long = "list")]
        list: bool,

        /// 解压到的目标目录 (默认是归档旁边的同名目录)
        #[arg(short = 'd', long = "destination", conflicts_with = "list")]
        destination: Option<PathBuf>,

        /// 覆盖目标目录里已经存在的条目
        #[arg(short = 'f', long = "force", conflicts_with = "list")]
        force: bool,
    },
    /// 把文件对象序列化为 JSON
    Serialize {
        /// 目标文件路径
        #[arg(required = true)]
        path: PathBuf,

        /// 把内容以 base64 形式内嵌进 JSON
        #[arg(short = 'c', long = "content")]
        content: bool,

        /// 缩进美化输出
        #[arg(short = 'p', long = "pretty")]
        pretty: bool,

        /// 写入到文件而不是标准输出
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
}
